mod bson;
mod collection;
mod errors;

pub use bson::Id;
pub use collection::{
    ensure_indexes_exist, Coll, MongoCollection, BALLOT_INDEX, CANDIDATE_INDEX,
    VOTER_NUMBER_INDEX, VOTE_INDEX,
};
pub use errors::is_duplicate_key_error;
