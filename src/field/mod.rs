pub(crate) mod activation;
pub(crate) mod pattern;
pub(crate) mod store;
