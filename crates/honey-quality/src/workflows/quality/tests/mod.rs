mod batch;
mod common;
mod validation;
