//! Kademlia distance calculations.

use primitive_types::U256;

use crate::domain::{KademliaError, NodeId, MAX_REQUEST_DISTANCES};

/// Bit width of identifiers, and therefore the number of buckets.
pub const ID_BITS: u32 = 256;

/// Calculate the XOR distance between two NodeIds
///
/// # Properties
/// - Symmetric: `distance(a, b) == distance(b, a)`
/// - Self is zero: `distance(a, a) == 0`
/// - Unique: for a fixed `a`, no two identifiers share a distance
pub fn distance(a: &NodeId, b: &NodeId) -> U256 {
    a.to_u256() ^ b.to_u256()
}

/// Bit length of the XOR distance, in `0..=256`.
///
/// `0` only when `a == b`. Peers at log2 distance `d` live in bucket `d - 1`.
pub fn log2_distance(a: &NodeId, b: &NodeId) -> u32 {
    distance(a, b).bits() as u32
}

/// Calculate the bucket index for a remote node relative to the local node.
///
/// The local identifier itself has no bucket and yields
/// [`KademliaError::InvalidSelfLookup`].
#[inline]
pub fn bucket_index(local: &NodeId, remote: &NodeId) -> Result<usize, KademliaError> {
    match log2_distance(local, remote) {
        0 => Err(KademliaError::InvalidSelfLookup),
        d => Ok(d as usize - 1),
    }
}

/// Distances to ask a peer for when looking up `target`.
///
/// Starts at the log2 distance between the two identifiers (1 for identical
/// ones) and fans out one step at a time, upward first:
/// `d, d+1, d-1, d+2, d-2, ...`. Values outside `1..=256` are skipped.
pub fn find_node_log2_distances(
    target: &NodeId,
    peer: &NodeId,
    size: usize,
) -> Result<Vec<u32>, KademliaError> {
    if size == 0 || size > MAX_REQUEST_DISTANCES {
        return Err(KademliaError::InvalidDistanceCount(size));
    }

    let first = log2_distance(target, peer).max(1);
    let mut distances = Vec::with_capacity(size);
    distances.push(first);

    let mut step = 1;
    while distances.len() < size {
        let up = first + step;
        let down = first.checked_sub(step).filter(|d| *d >= 1);
        if up > ID_BITS && down.is_none() {
            break;
        }
        if up <= ID_BITS {
            distances.push(up);
        }
        if let Some(down) = down {
            if distances.len() < size {
                distances.push(down);
            }
        }
        step += 1;
    }

    distances.truncate(size);
    Ok(distances)
}
