pub mod debounce;
pub mod filter;
pub mod mutation;
pub mod sort;

#[cfg(test)]
pub mod test_helpers;
