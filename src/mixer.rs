use blake2::{
    digest::{consts::U32, Digest},
    Blake2b,
};

type Blake2b256 = Blake2b<U32>;

/// Mixes labeled inputs through BLAKE2b-256 with domain separation and
/// length-prefixed feeding. Used to condense the stored seed record and the
/// ambient startup entropy into the generator's first reseed.
pub fn mix_entropy(inputs: &[(&str, &[u8])]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();

    hasher.update(b"fortuna-initial-seed-v1");

    for (label, data) in inputs {
        let label_bytes = label.as_bytes();
        hasher.update((label_bytes.len() as u64).to_le_bytes());
        hasher.update(label_bytes);

        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
    }

    let result = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&result);
    seed
}
