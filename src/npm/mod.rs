/*!

N-Plane Mutable counter vector (§4.4, NPM): a counter vector decomposed into
several bit-planes, each holding only the slots whose value actually needs
that plane, linked by overflow bits/rank structures instead of one wide
fixed-width field per slot.

Grounded on the teacher's `Rank9`/`SimpleSelectConst`
(`src/rank_sel/rank9.rs`, `src/rank_sel/simple_select_const.rs`): "wrap an
inner vector, add a side index, forward the core ops" is exactly their
shape, generalized here from a single rank-augmented bitset to a chain of
them.

*/

mod plane;
mod mutable;

pub use plane::{Plane, PlaneVariant};
pub use mutable::{NPlaneMutable, NpmOptions};
