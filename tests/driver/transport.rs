// Framed sessions over an in-memory duplex stream

use crate::common::helpers::term_query;
use crate::common::{Edit, Reply, Schema, TestSession};
use lexport::driver::codec::{Decoder, Encoder};
use lexport::driver::opcodes::Opcode;
use lexport::driver::server::{serve_stream, OversizePolicy};
use lexport::driver::transport::{Frame, FrameReader, FrameWriter};
use lexport::Session;

fn request(opcode: Opcode, body: impl FnOnce(&mut Encoder)) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_u8(opcode.tag());
    body(&mut enc);
    enc.into_bytes()
}

async fn reply<R>(frames: &mut FrameReader<R>) -> Reply
where
    R: tokio::io::AsyncRead + Unpin,
{
    match frames.read_frame().await.unwrap() {
        Some(Frame::Request(bytes)) => Reply::parse(&bytes),
        other => panic!("expected a reply frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_conversation_over_frames() {
    let temp = tempfile::tempdir().unwrap();
    let mut session = Session::new(&TestSession::config(&temp)).unwrap();

    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let serving = tokio::spawn(async move {
        serve_stream(
            &mut session,
            server_read,
            server_write,
            1024 * 1024,
            OversizePolicy::KeepOpen,
        )
        .await
    });

    let (client_read, client_write) = tokio::io::split(client);
    let mut frames = FrameReader::new(client_read, 1024 * 1024);
    let mut out = FrameWriter::new(client_write);

    out.write_frame(&request(Opcode::Open, |e| {
        e.write_u8(1);
        e.write_string("framed");
    }))
    .await
    .unwrap();
    reply(&mut frames).await.body();

    out.write_frame(&request(Opcode::AddDocument, |e| {
        Edit::new().add_value(0, "42").add_term("cat", 1).encode(e)
    }))
    .await
    .unwrap();
    assert_eq!(reply(&mut frames).await.u32(), 1);

    // A failing request does not end the conversation
    out.write_frame(&request(Opcode::Test, |e| e.write_u8(2)))
        .await
        .unwrap();
    assert_eq!(reply(&mut frames).await.error().0, 2);

    out.write_frame(&request(Opcode::QueryPage, |e| {
        e.write_u32(0);
        e.write_u32(10);
        term_query(e, "cat");
        Schema::new(Schema::DOCUMENT).value(0).encode(e);
    }))
    .await
    .unwrap();
    let body = reply(&mut frames).await.body();
    let mut dec = Decoder::new(&body);
    assert_eq!(dec.read_u32().unwrap(), 1);
    assert_eq!(dec.read_u8().unwrap(), 0);
    assert_eq!(dec.read_bytes().unwrap(), b"42");

    // Closing both halves ends the server loop
    drop(frames);
    drop(out);
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_oversized_frame_gets_an_error_reply() {
    let temp = tempfile::tempdir().unwrap();
    let mut session = Session::new(&TestSession::config(&temp)).unwrap();

    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let serving = tokio::spawn(async move {
        serve_stream(
            &mut session,
            server_read,
            server_write,
            32,
            OversizePolicy::Close,
        )
        .await
    });

    let (client_read, client_write) = tokio::io::split(client);
    let mut frames = FrameReader::new(client_read, 1024);
    let mut out = FrameWriter::new(client_write);

    out.write_frame(&request(Opcode::Test, |e| {
        e.write_u8(3);
        e.write_u32(64);
        for i in 0..64u8 {
            e.write_u8(i);
        }
    }))
    .await
    .unwrap();
    assert_eq!(reply(&mut frames).await.error(), (2, 0));

    // The server closed its side after replying
    serving.await.unwrap().unwrap();
    assert_eq!(frames.read_frame().await.unwrap(), None);
}
