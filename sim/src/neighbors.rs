use crate::Vec3;

/// Relative positions of the `k` agents closest to `center`, nearest first.
///
/// With `ignore_self` only the first agent sitting exactly on `center` is
/// skipped; later exact overlaps count as neighbors. Equal distances keep
/// roster order.
pub fn nearest_agents<I>(positions: I, center: Vec3, k: usize, ignore_self: bool) -> Vec<Vec3>
where
    I: IntoIterator<Item = Vec3>,
{
    let mut self_seen = !ignore_self;
    let mut relative: Vec<Vec3> = Vec::new();

    for pos in positions {
        let rel = pos - center;
        if !self_seen && rel.length_squared() == 0.0 {
            self_seen = true;
        } else {
            relative.push(rel);
        }
    }

    // sort_by is stable
    relative.sort_by(|a, b| a.length_squared().total_cmp(&b.length_squared()));
    relative.truncate(k);
    relative
}
