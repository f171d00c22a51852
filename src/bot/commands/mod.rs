pub mod data;
pub mod dev;
pub mod reminder;
pub mod server;

use crate::bot::{Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        server::server(),
        reminder::reminder(),
        data::data(),
        dev::dev(),
    ]
}
