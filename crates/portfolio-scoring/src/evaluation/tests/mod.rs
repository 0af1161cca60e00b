pub(crate) mod common;

mod aggregate;
mod recommendations;
mod statistics;
