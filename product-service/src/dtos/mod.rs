pub mod products;

pub use products::{
    ApiResponse, ProductBatch, ProductPatch, ProductResponse, EMPTY_BATCH_MESSAGE,
    INVALID_PRODUCT_MESSAGE,
};
