use comms::{
    command::{self, FeedCommand},
    event::{self, Event},
    transport,
};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::StreamExt;

#[tokio::test]
async fn assert_server_client_transport() {
    // bind to any free port so parallel test runs do not collide
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("could not bind to the port");
    let addr = listener.local_addr().expect("listener has no local addr");

    let (server_collected_commands, client_collected_events) =
        tokio::join!(execute_server(listener), execute_client(addr.to_string()));

    assert!(server_collected_commands.is_ok());
    assert!(client_collected_events.is_ok());

    assert_eq!(
        server_collected_commands.unwrap(),
        vec![
            FeedCommand::Subscribe(command::SubscribeCommand {
                room: "room-1".into(),
            }),
            FeedCommand::Unsubscribe(command::UnsubscribeCommand {
                room: "room-1".into(),
            }),
        ]
    );

    assert_eq!(
        client_collected_events.unwrap(),
        vec![Event::RoomSnapshot(event::RoomSnapshotEvent {
            room: "room-1".into(),
            value: Some(json!({ "owner": "owner-1" })),
        }),]
    );
}

async fn execute_server(listener: TcpListener) -> anyhow::Result<Vec<command::FeedCommand>> {
    // accept the only client connection we will have
    let tcp_stream = match listener.accept().await {
        Ok((tcp_stream, _addr)) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to accept client: {}", e)),
    };

    // break the client connection into higher level API for ease of use
    let (mut command_stream, mut event_writer) = transport::server::split_tcp_stream(tcp_stream);
    // store commands received from the client
    let mut collected_commands = Vec::new();

    // wait for the subscription before publishing anything
    match command_stream.next().await {
        Some(Ok(command)) => collected_commands.push(command),
        Some(Err(e)) => return Err(anyhow::anyhow!("failed to read command: {}", e)),
        None => return Err(anyhow::anyhow!("client closed the connection")),
    }

    event_writer
        .write(&Event::RoomSnapshot(event::RoomSnapshotEvent {
            room: "room-1".into(),
            value: Some(json!({ "owner": "owner-1" })),
        }))
        .await?;

    // listen for commands from the client until the connection is closed
    while let Some(result) = command_stream.next().await {
        match result {
            // client has sent a valid command which we could read and parse
            Ok(command) => collected_commands.push(command),
            // client has sent a command which we could not read or parse
            // could be a bug in the client, malicious client, breaking api changes etc.
            Err(e) => return Err(anyhow::anyhow!("failed to read command: {}", e)),
        }
    }

    Ok(collected_commands)
}

async fn execute_client(addr: String) -> anyhow::Result<Vec<event::Event>> {
    // create a client connection to the server
    let tcp_stream = match TcpStream::connect(addr).await {
        Ok(tcp_stream) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to connect to server: {}", e)),
    };

    // break the server connection into higher level API for ease of use
    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);
    // store events received from the server
    let mut collected_events = Vec::new();

    command_writer
        .write(&FeedCommand::Subscribe(command::SubscribeCommand {
            room: "room-1".into(),
        }))
        .await?;

    // read the first snapshot of the watched room
    match event_stream.next().await {
        // server has sent a valid event which we could read and parse
        Some(Ok(event)) => collected_events.push(event),
        // server has sent an event which we could not read or parse
        // could be a bug in the server, malicious server, breaking api changes etc.
        Some(Err(e)) => return Err(anyhow::anyhow!("could not parse event: {}", e)),
        // server has closed the connection, return an error
        None => return Err(anyhow::anyhow!("server closed the connection")),
    }

    command_writer
        .write(&FeedCommand::Unsubscribe(command::UnsubscribeCommand {
            room: "room-1".into(),
        }))
        .await?;

    // dropping the writer closes the stream so the server loop can finish
    drop(command_writer);

    Ok(collected_events)
}
