// Domain layer: 病患、藥物與決策的資料模型，以及與外部協作者的介面 (ports)

pub mod model;
pub mod ports;
