pub mod follows;
pub mod ingredients;
pub mod recipe_lists;
pub mod recipes;
pub mod shopping_list;
pub mod tags;
pub mod users;

pub use follows::*;
pub use ingredients::*;
pub use recipe_lists::*;
pub use recipes::*;
pub use shopping_list::*;
pub use tags::*;
pub use users::*;
