pub mod batcher;
pub mod deliver;
pub mod dispatch;
pub mod normalize;
pub mod record;
pub mod retry;
