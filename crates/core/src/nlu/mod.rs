//! Free-text interpretation shared by the app session and the messaging bot.
//!
//! `query` turns a search phrase into [`query::SearchCriteria`]; `responder`
//! classifies a chat message against a fixed rule table and renders the reply.
//! Both start from the same [`normalize`] step.

pub mod normalize;
pub mod query;
pub mod responder;
