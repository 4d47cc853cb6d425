//! `WebSocket` bridge between the bot and the dashboard
//!
//! Both sides exchange [`Packet`]s. Every received packet is routed to the handler registered
//! under its `event_type`, and the value returned by the handler is sent back under the same
//! `event_type`. A packet nobody handles closes the connection.

use crate::constants::intervals;
use futures::{future::BoxFuture, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::mpsc;
use tokio_tungstenite::{
	connect_async,
	tungstenite::{
		self,
		protocol::{frame::coding::CloseCode, CloseFrame},
		Message,
	},
};

pub(crate) mod features;

/// Event run right after connecting
pub(crate) const ON_CONNECT_EVENT: &str = "on_connect";

/// A message exchanged with the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Packet {
	/// Name of the handler
	pub(crate) event_type: String,
	/// Payload, free form
	#[serde(default)]
	pub(crate) data: Value,
}

impl Packet {
	/// Build a packet
	pub(crate) fn new(event_type: impl Into<String>, data: Value) -> Self {
		Self {
			event_type: event_type.into(),
			data,
		}
	}
}

/// Errors of the bridge
#[derive(Debug, thiserror::Error)]
pub(crate) enum RtwsError {
	/// The `WebSocket` transport failed
	#[error(transparent)]
	WebSocket(#[from] tungstenite::Error),
	/// A packet could not be parsed or serialized
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	/// A packet payload is not what the handler expects
	#[error("malformed `{event_type}` payload: {reason}")]
	MalformedPayload {
		/// Event of the payload
		event_type: &'static str,
		/// What is wrong
		reason: &'static str,
	},
	/// The bridge task stopped
	#[error("the dashboard bridge is not running")]
	Stopped,
}

/// Result of a handler, `None` sends nothing back
pub(crate) type HandlerResult = Result<Option<Value>, RtwsError>;

/// A registered handler
type Handler<S> = Box<dyn Fn(S, Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// What to do with a received packet
#[derive(Debug, PartialEq)]
pub(crate) enum Dispatch {
	/// Send this packet back
	Reply(Packet),
	/// The handler had nothing to say
	Nothing,
	/// No handler is registered for this event
	Unknown(String),
}

/// Named asynchronous handlers sharing a state
pub(crate) struct Router<S> {
	/// Handlers by event type
	handlers: HashMap<String, Handler<S>>,
}

impl<S> fmt::Debug for Router<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("events", &self.handlers.keys())
			.finish()
	}
}

impl<S> Default for Router<S> {
	fn default() -> Self {
		Self {
			handlers: HashMap::new(),
		}
	}
}

impl<S: Clone + Send + 'static> Router<S> {
	/// Register a handler, replacing the previous one of the same event
	#[must_use]
	pub(crate) fn on<F, Fut>(mut self, event_type: &str, handler: F) -> Self
	where
		F: Fn(S, Value) -> Fut + Send + Sync + 'static,
		Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
	{
		self.handlers.insert(
			event_type.to_owned(),
			Box::new(move |state, data| Box::pin(handler(state, data))),
		);
		self
	}

	/// Whether a handler is registered for the event
	#[must_use]
	pub(crate) fn handles(&self, event_type: &str) -> bool {
		self.handlers.contains_key(event_type)
	}

	/// Run the handler of a packet
	pub(crate) async fn dispatch(&self, state: S, packet: Packet) -> Result<Dispatch, RtwsError> {
		let Some(handler) = self.handlers.get(&packet.event_type) else {
			return Ok(Dispatch::Unknown(packet.event_type));
		};

		Ok(match handler(state, packet.data).await? {
			Some(data) => Dispatch::Reply(Packet::new(packet.event_type, data)),
			None => Dispatch::Nothing,
		})
	}
}

/// Queue packets towards the dashboard from anywhere
#[derive(Debug, Clone)]
pub(crate) struct RtwsHandle {
	/// Packets waiting for the connection
	sender: mpsc::UnboundedSender<Packet>,
}

impl RtwsHandle {
	/// Queue a packet, sent as soon as the bridge is connected
	pub(crate) fn send(&self, event_type: &str, data: Value) -> Result<(), RtwsError> {
		self.sender
			.send(Packet::new(event_type, data))
			.map_err(|_| RtwsError::Stopped)
	}
}

/// Connect to the dashboard and keep reconnecting until the process stops
pub(crate) fn start<S>(url: String, router: Router<S>, state: S) -> RtwsHandle
where
	S: Clone + Send + Sync + 'static,
{
	let (sender, mut outgoing) = mpsc::unbounded_channel();
	let router = Arc::new(router);

	tokio::spawn(async move {
		loop {
			match connect_async(url.as_str()).await {
				Ok((stream, _)) => {
					tracing::info!(url = url, "connected to the dashboard");

					if let Err(error) = serve(stream, &router, &state, &mut outgoing).await {
						tracing::warn!(error = ?error, "dashboard connection failed");
					}

					tracing::info!("disconnected from the dashboard");
				}
				Err(error) => {
					tracing::debug!(error = ?error, url = url, "could not reach the dashboard");
				}
			}

			tracing::info!(delay = ?intervals::RTWS_RECONNECT, "reconnecting to the dashboard");
			tokio::time::sleep(intervals::RTWS_RECONNECT).await;
		}
	});

	RtwsHandle { sender }
}

/// Serve one connection until it closes
async fn serve<St, S>(
	stream: St,
	router: &Router<S>,
	state: &S,
	outgoing: &mut mpsc::UnboundedReceiver<Packet>,
) -> Result<(), RtwsError>
where
	St: futures::Stream<Item = Result<Message, tungstenite::Error>>
		+ futures::Sink<Message, Error = tungstenite::Error>
		+ Unpin,
	S: Clone + Send + 'static,
{
	let (mut write, mut read) = stream.split();

	if router.handles(ON_CONNECT_EVENT) {
		let greeting = Packet::new(ON_CONNECT_EVENT, Value::Null);
		if let Dispatch::Reply(packet) = router.dispatch(state.clone(), greeting).await? {
			write
				.send(Message::Text(serde_json::to_string(&packet)?))
				.await?;
		}
	}

	loop {
		tokio::select! {
			message = read.next() => {
				let text = match message {
					Some(Ok(Message::Text(text))) => text,
					Some(Ok(Message::Close(frame))) => {
						tracing::debug!(frame = ?frame, "dashboard closed the connection");
						return Ok(());
					}
					Some(Ok(_)) => continue,
					Some(Err(error)) => return Err(error.into()),
					None => return Ok(()),
				};

				let packet = serde_json::from_str::<Packet>(&text)?;
				tracing::trace!(event_type = packet.event_type, "dashboard packet");

				match router.dispatch(state.clone(), packet).await? {
					Dispatch::Reply(packet) => {
						write.send(Message::Text(serde_json::to_string(&packet)?)).await?;
					}
					Dispatch::Nothing => {}
					Dispatch::Unknown(event_type) => {
						tracing::warn!(event_type = event_type, "dashboard sent an unknown event");

						write
							.send(Message::Close(Some(CloseFrame {
								code: CloseCode::Unsupported,
								reason: format!("unknown event `{event_type}`").into(),
							})))
							.await?;

						return Ok(());
					}
				}
			}
			Some(packet) = outgoing.recv() => {
				write.send(Message::Text(serde_json::to_string(&packet)?)).await?;
			}
		}
	}
}

/// Read the id carried by a payload, as a number or a string
pub(crate) fn parse_id(value: &Value) -> Option<u64> {
	match value {
		Value::Number(number) => number.as_u64(),
		Value::String(string) => string.parse().ok(),
		_ => None,
	}
	.filter(|&id| id != 0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn router() -> Router<u64> {
		Router::default()
			.on("add", |offset, data| async move {
				Ok(data.as_u64().map(|value| json!(value + offset)))
			})
			.on("print", |_, _| async { Ok(None) })
	}

	#[test]
	fn packets_have_the_dashboard_shape() {
		let packet = serde_json::from_str::<Packet>(r#"{"event_type":"ping"}"#).unwrap();

		assert_eq!(packet, Packet::new("ping", Value::Null));
		assert_eq!(
			serde_json::to_value(Packet::new("add", json!(1))).unwrap(),
			json!({ "event_type": "add", "data": 1 })
		);
	}

	#[tokio::test]
	async fn handlers_answer_under_the_same_event() {
		let router = router();

		assert_eq!(
			router.dispatch(10, Packet::new("add", json!(5))).await.unwrap(),
			Dispatch::Reply(Packet::new("add", json!(15)))
		);
		assert_eq!(
			router.dispatch(10, Packet::new("print", json!("hi"))).await.unwrap(),
			Dispatch::Nothing
		);
	}

	#[tokio::test]
	async fn unknown_events_are_reported() {
		assert_eq!(
			router().dispatch(0, Packet::new("nope", Value::Null)).await.unwrap(),
			Dispatch::Unknown("nope".to_owned())
		);
	}

	#[test]
	fn ids_are_numbers_or_strings() {
		assert_eq!(parse_id(&json!(42)), Some(42));
		assert_eq!(parse_id(&json!("42")), Some(42));
		assert_eq!(parse_id(&json!(0)), None);
		assert_eq!(parse_id(&json!(-1)), None);
		assert_eq!(parse_id(&json!({ "id": 1 })), None);
	}

	#[tokio::test]
	async fn queued_packets_fail_once_stopped() {
		let (sender, receiver) = mpsc::unbounded_channel();
		let handle = RtwsHandle { sender };

		handle.send("hello", Value::Null).unwrap();
		drop(receiver);

		assert!(matches!(
			handle.send("hello", Value::Null),
			Err(RtwsError::Stopped)
		));
	}
}
