pub mod stub;
pub mod yolo;
