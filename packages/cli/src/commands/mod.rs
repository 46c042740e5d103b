pub mod edit;
pub mod show;
pub mod stock;

pub use edit::{add, clear, remove, set, AddArgs, ClearArgs, RemoveArgs, SetArgs};
pub use show::show;
pub use stock::{check, fix};
