pub mod camera;
pub mod theta;

pub(self) mod util;
use util::impl_module;
