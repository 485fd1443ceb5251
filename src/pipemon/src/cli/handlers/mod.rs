mod discover;
mod respond;

pub(super) use discover::discover;
pub(super) use respond::respond;
