//! Ports (hexagonal boundaries) of the forwarding gateway.

pub mod inbound;
pub mod outbound;

pub use inbound::GatewayApi;
pub use outbound::{
    DirectivePublisher, DistributedRegistry, EnvelopeCodec, FrameSink, FrameSource,
    HandlerReply, HandlerSignal, LoginHandler, MessageHandler, SignupHandler,
};
