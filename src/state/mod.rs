pub mod category;
pub mod view_state;

pub use category::Category;
pub use view_state::ViewState;
