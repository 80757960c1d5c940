mod convert;
mod devices;
mod load;
mod run;

pub use convert::convert;
pub use devices::devices;
pub use load::load;
pub use run::run;
