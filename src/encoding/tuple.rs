//! Tuples of encodings, written column by column.

use super::codec::Codec;
use super::iter::{BoxedIterator, SkippableIterator};
use super::primitive::PrimitiveEncoding;
use super::{decode_block, encode_block, Encoding, Value};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Splits a value into one field per sub-encoding.
pub type PreEncodeFn = Arc<dyn Fn(&Value) -> Result<Vec<Value>> + Send + Sync>;

/// Rebuilds a value from its decoded fields.
pub type PostDecodeFn = Arc<dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync>;

/// A primitive encoding made of `encodings.len()` fields.
///
/// A batch is written as one `PRIMITIVE` sub-block per field, each holding
/// that field of every value. The block size is the smallest block size of
/// the fields, so every field is chunked the same way.
pub fn tuple<P, D>(pre_encode: P, post_decode: D, encodings: Vec<Encoding>) -> Result<PrimitiveEncoding>
where
    P: Fn(&Value) -> Result<Vec<Value>> + Send + Sync + 'static,
    D: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
{
    let block_size = encodings
        .iter()
        .map(Encoding::block_size)
        .min()
        .ok_or_else(|| Error::invalid_argument("a tuple needs at least one field"))?;
    tuple_with_block_size(pre_encode, post_decode, block_size, encodings)
}

/// Like [`tuple`], with an explicit block size.
pub fn tuple_with_block_size<P, D>(
    pre_encode: P,
    post_decode: D,
    block_size: usize,
    encodings: Vec<Encoding>,
) -> Result<PrimitiveEncoding>
where
    P: Fn(&Value) -> Result<Vec<Value>> + Send + Sync + 'static,
    D: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
{
    if encodings.is_empty() {
        return Err(Error::invalid_argument("a tuple needs at least one field"));
    }
    let fields: Arc<[Encoding]> = encodings.into();
    let pre_encode: PreEncodeFn = Arc::new(pre_encode);
    let post_decode: PostDecodeFn = Arc::new(post_decode);

    let description = format!(
        "({})",
        fields.iter().map(|e| e.description()).collect::<Vec<_>>().join(", ")
    );

    let codec = {
        let encode_fields = fields.clone();
        let encode_split = pre_encode.clone();
        let decode_fields = fields.clone();
        Codec::batch(
            move |values, out| {
                let rows = values
                    .iter()
                    .map(|value| split(&encode_split, value, encode_fields.len()))
                    .collect::<Result<Vec<_>>>()?;
                for (i, encoding) in encode_fields.iter().enumerate() {
                    let column: Vec<Value> = rows.iter().map(|row| row[i].clone()).collect();
                    encode_block(&column, encoding, out)?;
                }
                Ok(())
            },
            move |mut input, root| {
                let iterators = decode_fields
                    .iter()
                    .map(|encoding| decode_block(&mut input, root, encoding))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(TupleIterator { iterators, post_decode: post_decode.clone() })
                    as BoxedIterator)
            },
        )
    };

    let singleton_fields = fields.clone();
    let encoding = PrimitiveEncoding::new(description, block_size, codec).with_singleton_fn(
        move |value| match split(&pre_encode, value, singleton_fields.len()) {
            Ok(row) => row.iter().zip(singleton_fields.iter()).any(|(v, e)| e.is_singleton(v)),
            Err(_) => false,
        },
    );
    Ok(encoding)
}

/// A tuple over [`Value::Tuple`]s whose fields use `encodings` in order.
pub fn tuple_of(encodings: Vec<Encoding>) -> Result<PrimitiveEncoding> {
    let arity = encodings.len();
    tuple(
        move |value| match value.as_tuple() {
            Some(fields) if fields.len() == arity => Ok(fields.to_vec()),
            Some(fields) => Err(Error::encoding(format!(
                "expected a {}-tuple, got {} fields",
                arity,
                fields.len()
            ))),
            None => Err(Error::encoding(format!("expected tuple, got {}", value.kind()))),
        },
        |fields| Ok(Value::Tuple(fields)),
        encodings,
    )
}

fn split(pre_encode: &PreEncodeFn, value: &Value, arity: usize) -> Result<Vec<Value>> {
    let row = pre_encode(value)?;
    if row.len() != arity {
        return Err(Error::encoding(format!(
            "pre-encode produced {} fields for a {}-field tuple",
            row.len(),
            arity
        )));
    }
    Ok(row)
}

/// One iterator per field, advanced in lockstep.
struct TupleIterator {
    iterators: Vec<BoxedIterator>,
    post_decode: PostDecodeFn,
}

impl TupleIterator {
    fn check_aligned(&self) -> Result<()> {
        let first = self.iterators[0].has_next();
        if self.iterators.iter().any(|it| it.has_next() != first) {
            return Err(Error::corruption("tuple fields have different lengths"));
        }
        Ok(())
    }
}

impl SkippableIterator for TupleIterator {
    fn has_next(&self) -> bool {
        self.iterators.iter().any(|it| it.has_next())
    }

    fn next_value(&mut self) -> Result<Value> {
        self.check_aligned()?;
        let fields = self
            .iterators
            .iter_mut()
            .map(|it| it.next_value())
            .collect::<Result<Vec<_>>>()?;
        (self.post_decode)(fields)
    }

    fn skip_next(&mut self) -> Result<()> {
        self.check_aligned()?;
        for it in &mut self.iterators {
            it.skip_next()?;
        }
        Ok(())
    }

    fn skip_n(&mut self, n: u64) -> Result<()> {
        for it in &mut self.iterators {
            it.skip_n(n)?;
        }
        Ok(())
    }
}
