//! Static time range algebra: the operations that maintain "output is
//! invariant over this span" interval lists.

pub mod ranges;
