use crate::format::FormatError;

/// Ordered query string pairs.
pub type QueryPairs = Vec<(String, String)>;

/// Explicit serialization of a request value into query string parameters.
///
/// Every call appends these pairs to the request URL, including calls whose
/// value is also sent as the request body.
pub trait QueryParameters {
    fn to_query_parameters(&self) -> Result<QueryPairs, FormatError>;
}

impl QueryParameters for () {
    fn to_query_parameters(&self) -> Result<QueryPairs, FormatError> {
        Ok(Vec::new())
    }
}

impl<T: QueryParameters + ?Sized> QueryParameters for &T {
    fn to_query_parameters(&self) -> Result<QueryPairs, FormatError> {
        (**self).to_query_parameters()
    }
}

impl<T: QueryParameters> QueryParameters for Option<T> {
    fn to_query_parameters(&self) -> Result<QueryPairs, FormatError> {
        match self {
            Some(value) => value.to_query_parameters(),
            None => Ok(Vec::new()),
        }
    }
}
