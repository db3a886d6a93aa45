pub(crate) mod buffer;
pub(crate) mod capture;
pub(crate) mod composite;
pub(crate) mod pipeline;
