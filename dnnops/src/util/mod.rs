pub mod bench;
#[cfg(test)]
pub(crate) mod testing;
