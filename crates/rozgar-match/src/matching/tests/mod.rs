pub(crate) mod common;

mod notify;
