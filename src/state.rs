use crate::{
    db::{DbPool, OrmConn, orm_from_pool},
    token::TokenIssuer,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(pool: &DbPool, tokens: TokenIssuer) -> Self {
        Self {
            orm: orm_from_pool(pool),
            tokens,
        }
    }
}
