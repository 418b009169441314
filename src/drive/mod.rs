// sitebackup/src/drive/mod.rs
pub(crate) mod folders;
pub(crate) mod http;
pub(crate) mod session;
pub(crate) mod store;
pub(crate) mod token;
pub(crate) mod upload;

#[cfg(test)]
pub(crate) mod fake;
