mod favorites;
mod ingredients;
mod recipes;
mod shopping_cart;
mod short_links;
mod subscriptions;
mod tags;
mod users;

#[cfg(test)]
mod test_data;

pub use favorites::*;
pub use ingredients::*;
pub use recipes::*;
pub use shopping_cart::*;
pub use short_links::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;
