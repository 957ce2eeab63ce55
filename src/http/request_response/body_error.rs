use std::error::Error as StdError;

// Error type shared by buffered and streamed response bodies.
// Streamed file bodies fail with `std::io::Error`.
pub type BodyError = Box<dyn StdError + Send + Sync>;

pub fn box_err<E>(err: E) -> BodyError
where
    E: StdError + Send + Sync + 'static,
{
    Box::new(err)
}
