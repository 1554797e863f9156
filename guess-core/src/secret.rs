use guess_types::{SECRET_MAX, SECRET_MIN};
use rand::Rng;

/// Source of room secrets. The scheduler draws one per room.
pub trait SecretSource: Send + Sync {
    fn draw(&self) -> i64;
}

/// Uniform draw from `SECRET_MIN..=SECRET_MAX` using the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecret;

impl SecretSource for RandomSecret {
    fn draw(&self) -> i64 {
        rand::rng().random_range(SECRET_MIN..=SECRET_MAX)
    }
}

/// Always returns the same secret. Used to make games reproducible in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSecret(pub i64);

impl SecretSource for FixedSecret {
    fn draw(&self) -> i64 {
        self.0
    }
}
