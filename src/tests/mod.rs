
#[cfg(test)]
pub mod provision_tests;
