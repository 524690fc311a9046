pub mod asset_service;
pub mod balance_service;
pub mod matching_engine;
pub mod order_service;
