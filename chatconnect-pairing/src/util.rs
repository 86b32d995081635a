use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// The characters an invite code is drawn from.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The length of a room invite code.
pub const CODE_LENGTH: usize = 6;

/// Generates a fresh invite code.
///
/// The code space is large enough that collisions are not checked for.
pub fn invite_code() -> String {
    let mut rng = thread_rng();

    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generates a random document id, in the store's auto-id style.
pub fn document_id() -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(20)
        .collect()
}
