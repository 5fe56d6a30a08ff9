pub mod svt;
pub mod vtm;
