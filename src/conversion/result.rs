//! Lazy result wrappers

use super::{JsonResultConverter, ResultConverter, ToJson};
use crate::error::{DataAccessError, DataAccessResult};
use serde::de::DeserializeOwned;
use std::fmt;

/// Lazy sequence of results, in the order the source produced them
pub struct QueryResult<T> {
    iter: Box<dyn Iterator<Item = T> + Send>,
}

impl<T: 'static> QueryResult<T> {
    pub fn new<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            iter: Box::new(source.into_iter()),
        }
    }

    /// Convert each element through JSON into `R`
    pub fn to<R>(self) -> ConvertedResult<R>
    where
        T: ToJson,
        R: DeserializeOwned + 'static,
    {
        self.to_with(JsonResultConverter)
    }

    /// Convert each element with a custom converter
    pub fn to_with<R, C>(self, converter: C) -> ConvertedResult<R>
    where
        R: 'static,
        C: ResultConverter<T, R> + Send + 'static,
    {
        ConvertedResult {
            iter: Box::new(
                self.iter
                    .map(move |value| converter.convert(value).map_err(DataAccessError::from)),
            ),
        }
    }

    pub fn map<R, F>(self, f: F) -> QueryResult<R>
    where
        R: 'static,
        F: FnMut(T) -> R + Send + 'static,
    {
        QueryResult {
            iter: Box::new(self.iter.map(f)),
        }
    }

    /// The only element; fails on none or more than one
    pub fn single(self) -> DataAccessResult<T> {
        self.single_or_none()?.ok_or(DataAccessError::EmptyResult)
    }

    /// The only element if there is one; fails on more than one
    pub fn single_or_none(mut self) -> DataAccessResult<Option<T>> {
        let first = self.iter.next();
        if first.is_some() && self.iter.next().is_some() {
            return Err(DataAccessError::IncorrectResultSize {
                expected: 1,
                actual: 2 + self.iter.count(),
            });
        }
        Ok(first)
    }

    /// Feed every element to `handler`
    pub fn handle<F: FnMut(T)>(self, handler: F) {
        self.iter.for_each(handler);
    }

    pub fn as_vec(self) -> Vec<T> {
        self.iter.collect()
    }
}

impl<T> Iterator for QueryResult<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.iter.next()
    }
}

impl<T> fmt::Debug for QueryResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult").finish_non_exhaustive()
    }
}

/// Lazy sequence of converted results; each element may have failed to convert
pub struct ConvertedResult<R> {
    iter: Box<dyn Iterator<Item = DataAccessResult<R>> + Send>,
}

impl<R: 'static> ConvertedResult<R> {
    pub fn map<U, F>(self, mut f: F) -> ConvertedResult<U>
    where
        U: 'static,
        F: FnMut(R) -> U + Send + 'static,
    {
        ConvertedResult {
            iter: Box::new(self.iter.map(move |item| item.map(&mut f))),
        }
    }

    pub fn single(self) -> DataAccessResult<R> {
        self.single_or_none()?.ok_or(DataAccessError::EmptyResult)
    }

    pub fn single_or_none(mut self) -> DataAccessResult<Option<R>> {
        let Some(first) = self.iter.next() else {
            return Ok(None);
        };
        if self.iter.next().is_some() {
            return Err(DataAccessError::IncorrectResultSize {
                expected: 1,
                actual: 2 + self.iter.count(),
            });
        }
        first.map(Some)
    }

    /// Feed every converted element to `handler`, stopping at the first
    /// conversion failure
    pub fn handle<F: FnMut(R)>(self, mut handler: F) -> DataAccessResult<()> {
        for item in self.iter {
            handler(item?);
        }
        Ok(())
    }

    pub fn as_vec(self) -> DataAccessResult<Vec<R>> {
        self.iter.collect()
    }
}

impl<R> Iterator for ConvertedResult<R> {
    type Item = DataAccessResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

impl<R> fmt::Debug for ConvertedResult<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertedResult").finish_non_exhaustive()
    }
}
