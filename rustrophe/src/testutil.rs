//! Scripted in-memory peer for negotiation and session tests.

use tokio::io::{AsyncWriteExt, DuplexStream};

use crate::proto::{self, StreamEvent, StreamReader};
use crate::stanza::Stanza;

/// A reader that has already consumed a stream header, for tests that skip
/// negotiation and start in the middle of an established stream.
pub(crate) fn opened_reader() -> StreamReader {
    let mut reader = StreamReader::new();
    reader.feed(
        b"<?xml version='1.0'?><stream:stream version='1.0' \
          xmlns:stream='http://etherx.jabber.org/streams' xmlns='jabber:client'>",
    );
    match reader.read() {
        Ok(Some(StreamEvent::Opened(_))) => reader,
        other => panic!("priming the reader failed: {:?}", other),
    }
}

/// The server half of a duplex pipe. Tests drive it step by step alongside
/// the client under test, asserting on what the client wrote and replying
/// with canned XML.
pub(crate) struct ScriptedServer {
    stream: DuplexStream,
    reader: StreamReader,
}

impl ScriptedServer {
    pub(crate) fn new(stream: DuplexStream) -> ScriptedServer {
        ScriptedServer {
            stream,
            reader: StreamReader::new(),
        }
    }

    /// A server whose reader pretends the client header was already seen.
    pub(crate) fn primed(stream: DuplexStream) -> ScriptedServer {
        ScriptedServer {
            stream,
            reader: opened_reader(),
        }
    }

    /// Swap in a fresh reader after a stream restart.
    pub(crate) fn restart(&mut self) {
        self.reader = StreamReader::new();
    }

    pub(crate) async fn send(&mut self, xml: &str) {
        self.stream.write_all(xml.as_bytes()).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    pub(crate) async fn send_header(&mut self, id: &str) {
        self.send(&format!(
            "<?xml version='1.0'?><stream:stream id='{}' from='capulet.example' \
             version='1.0' xmlns:stream='http://etherx.jabber.org/streams' \
             xmlns='jabber:client'>",
            id
        ))
        .await;
    }

    pub(crate) async fn send_footer(&mut self) {
        self.send(proto::STREAM_FOOTER).await;
    }

    async fn next_event(&mut self) -> StreamEvent {
        proto::read_event(&mut self.stream, &mut self.reader)
            .await
            .unwrap()
    }

    /// Wait for the client's stream header.
    pub(crate) async fn expect_open(&mut self) {
        match self.next_event().await {
            StreamEvent::Opened(_) => (),
            other => panic!("expected stream header, got {:?}", other),
        }
    }

    pub(crate) async fn expect_stanza(&mut self) -> Stanza {
        match self.next_event().await {
            StreamEvent::Stanza(st) => st,
            other => panic!("expected a stanza, got {:?}", other),
        }
    }

    /// Wait for the client's stream footer.
    pub(crate) async fn expect_close(&mut self) {
        match self.next_event().await {
            StreamEvent::Closed => (),
            other => panic!("expected stream footer, got {:?}", other),
        }
    }
}
