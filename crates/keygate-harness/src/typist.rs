//! Seeded random typist.
//!
//! Produces reproducible keystroke streams: printable noise, some of it
//! typed into text fields, optionally ending with a passphrase.

use keygate_core::Keystroke;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Share of noise keystrokes that land in a text field, in percent.
const TEXT_INPUT_PERCENT: u32 = 25;

/// Deterministic keystroke generator.
#[derive(Debug, Clone)]
pub struct Typist {
    rng: ChaCha8Rng,
    seed: u64,
}

impl Typist {
    /// Create a typist from a seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), seed }
    }

    /// The seed this typist was created with, for reproducing failures.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// `count` random printable ASCII keystrokes, a quarter of them typed
    /// into text fields.
    pub fn noise(&mut self, count: usize) -> Vec<Keystroke> {
        (0..count)
            .map(|_| {
                let key = char::from(self.rng.gen_range(b' '..=b'~'));
                if self.rng.gen_ratio(TEXT_INPUT_PERCENT, 100) {
                    Keystroke::text_input(key)
                } else {
                    Keystroke::ambient(key)
                }
            })
            .collect()
    }

    /// Random noise followed by `passphrase` typed ambiently.
    pub fn noise_then(&mut self, count: usize, passphrase: &str) -> Vec<Keystroke> {
        let mut keys = self.noise(count);
        keys.extend(passphrase.chars().map(Keystroke::ambient));
        keys
    }

    /// `passphrase` typed ambiently with text-field keystrokes interleaved.
    ///
    /// The interleaved keys never reach the window, so the passphrase still
    /// arrives intact.
    pub fn interleaved(&mut self, passphrase: &str) -> Vec<Keystroke> {
        let mut keys = Vec::new();
        for c in passphrase.chars() {
            let distractions = self.rng.gen_range(0..3);
            for _ in 0..distractions {
                keys.push(Keystroke::text_input(char::from(self.rng.gen_range(b'a'..=b'z'))));
            }
            keys.push(Keystroke::ambient(c));
        }
        keys
    }
}
