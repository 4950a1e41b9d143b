//! Offline test double for the network layer.
#![allow(dead_code)]

use mapineq_rs::error::{Error, Result};
use mapineq_rs::transport::Transport;
use mapineq_rs::{Client, ClientConfig};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::cell::RefCell;

pub const BASE: &str = "http://mapineq.test/functions/postgisftw.";

/// Serves canned bodies per route and records every requested URL.
#[derive(Default)]
pub struct FakeTransport {
    routes: Vec<(&'static str, Value)>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: &'static str, body: Value) -> Self {
        self.routes.push((route, body));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Routes hit, in call order.
    pub fn routes_called(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|u| route_of(u).to_string())
            .collect()
    }

    pub fn params(&self, call: usize) -> Vec<(String, String)> {
        query_params(&self.calls.borrow()[call])
    }
}

impl Transport for FakeTransport {
    fn get_json(&self, url: &str) -> Result<Value> {
        self.calls.borrow_mut().push(url.to_string());
        let route = route_of(url);
        self.routes
            .iter()
            .find(|(r, _)| *r == route)
            .map(|(_, body)| body.clone())
            .ok_or_else(|| Error::Transport {
                url: url.to_string(),
                status: Some(404),
                reason: "HTTP 404 Not Found".into(),
            })
    }
}

pub fn client(fake: &FakeTransport) -> Client<&FakeTransport> {
    Client::with_transport(ClientConfig::default().with_base_url(BASE), fake)
}

pub fn client_with(config: ClientConfig, fake: &FakeTransport) -> Client<&FakeTransport> {
    Client::with_transport(config.with_base_url(BASE), fake)
}

/// `get_x_data` for `<BASE>get_x_data/items.json?...`.
pub fn route_of(url: &str) -> &str {
    let path = url.strip_prefix(BASE).unwrap_or(url);
    path.split("/items.json").next().unwrap_or(path)
}

pub fn query_params(url: &str) -> Vec<(String, String)> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .map(|kv| {
            let (k, v) = kv.split_once('=').unwrap_or((kv, ""));
            (
                percent_decode_str(k).decode_utf8().unwrap().into_owned(),
                percent_decode_str(v).decode_utf8().unwrap().into_owned(),
            )
        })
        .collect()
}

pub fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
