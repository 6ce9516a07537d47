pub(crate) mod maintain;
pub(crate) mod pools;
pub(crate) mod restore;
pub(crate) mod select;
