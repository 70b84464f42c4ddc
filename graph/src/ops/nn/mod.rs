mod arg_max_min;
mod reduce;
mod topk;

pub use arg_max_min::ArgMaxMin;
pub use reduce::{Reduce, Reducer};
pub use topk::TopK;
