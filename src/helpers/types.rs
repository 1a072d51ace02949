pub type Res<T> = Result<T, Box<dyn std::error::Error>>;
pub type Bytes = Vec<u8>;
