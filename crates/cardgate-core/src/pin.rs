//! PIN generation for newly programmed cards

use rand::Rng;

use crate::types::Passcode;
use crate::PIN_LENGTH;

/// Generate a fresh random PIN using the thread-local CSPRNG
pub fn generate_pin() -> Passcode {
    generate_pin_with(&mut rand::thread_rng())
}

/// Generate a PIN from the given RNG
pub fn generate_pin_with<R: Rng>(rng: &mut R) -> Passcode {
    let digits: String = (0..PIN_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    Passcode::from_digits(digits)
}
