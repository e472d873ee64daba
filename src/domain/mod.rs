mod inventory;
mod menu;
mod money;
mod order;
mod period;
mod request;
mod restaurant;

pub use inventory::*;
pub use menu::*;
pub use money::*;
pub use order::*;
pub use period::*;
pub use request::*;
pub use restaurant::*;
