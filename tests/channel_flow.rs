//! Channel membership flows over the wire: JOIN, NAMES, TOPIC, PART,
//! MODE, INVITE.

mod common;

use common::TestServer;

#[test]
fn join_echo_topic_and_names() -> anyhow::Result<()> {
    let server = TestServer::spawn(16711)?;
    let mut alice = server.connect()?;
    alice.register("secret", "alice")?;

    alice.send_raw("JOIN #lobby")?;
    assert_eq!(alice.recv()?, ":alice!alice@host JOIN #lobby");
    assert_eq!(alice.recv()?, "331 alice #lobby :No topic is set");
    assert_eq!(alice.recv()?, "353 alice = #lobby :@alice ");
    assert_eq!(alice.recv()?, "366 alice #lobby :End of /NAMES list");
    Ok(())
}

#[test]
fn names_reply_keeps_join_order_with_operator_prefix() -> anyhow::Result<()> {
    let server = TestServer::spawn(16712)?;
    let mut alice = server.connect()?;
    let mut bob = server.connect()?;
    let mut charlie = server.connect()?;
    alice.register("secret", "alice")?;
    bob.register("secret", "bob")?;
    charlie.register("secret", "charlie")?;

    alice.send_raw("JOIN #r")?;
    alice.recv_until(|line| line.starts_with("366"))?;
    bob.send_raw("JOIN #r")?;
    bob.recv_until(|line| line.starts_with("366"))?;
    charlie.send_raw("JOIN #r")?;

    let lines = charlie.recv_until(|line| line.starts_with("366"))?;
    assert!(lines.contains(&"353 charlie = #r :@alice bob charlie ".to_string()));
    Ok(())
}

#[test]
fn topic_write_by_non_operator_is_refused_without_broadcast() -> anyhow::Result<()> {
    let server = TestServer::spawn(16713)?;
    let mut alice = server.connect()?;
    let mut bob = server.connect()?;
    alice.register("secret", "alice")?;
    bob.register("secret", "bob")?;

    alice.send_raw("JOIN #lobby")?;
    alice.recv_until(|line| line.starts_with("366"))?;
    bob.send_raw("JOIN #lobby")?;
    bob.recv_until(|line| line.starts_with("366"))?;
    // Alice sees bob arrive.
    assert_eq!(alice.recv()?, ":bob!bob@host JOIN #lobby");

    // The channel starts topic-restricted and bob is not an operator.
    bob.send_raw("TOPIC #lobby :hello world")?;
    assert_eq!(bob.recv()?, "482 bob #lobby :You're not channel operator");

    // No TOPIC broadcast reached alice: the next thing she sees is a
    // plain message marker.
    bob.send_raw("PRIVMSG #lobby :marker")?;
    assert_eq!(alice.recv()?, ":bob!bob@host PRIVMSG #lobby :marker");
    Ok(())
}

#[test]
fn topic_write_by_operator_broadcasts_to_all() -> anyhow::Result<()> {
    let server = TestServer::spawn(16714)?;
    let mut alice = server.connect()?;
    let mut bob = server.connect()?;
    alice.register("secret", "alice")?;
    bob.register("secret", "bob")?;

    alice.send_raw("JOIN #lobby")?;
    alice.recv_until(|line| line.starts_with("366"))?;
    bob.send_raw("JOIN #lobby")?;
    bob.recv_until(|line| line.starts_with("366"))?;
    alice.recv()?; // bob's JOIN echo

    alice.send_raw("TOPIC #lobby :hello world")?;
    for client in [&mut alice, &mut bob] {
        assert_eq!(client.recv()?, ":alice!alice@host TOPIC #lobby :hello world");
    }

    // A later reader sees the stored topic.
    bob.send_raw("TOPIC #lobby")?;
    assert_eq!(bob.recv()?, "332 bob #lobby :hello world");
    Ok(())
}

#[test]
fn part_broadcasts_to_the_full_roster() -> anyhow::Result<()> {
    let server = TestServer::spawn(16715)?;
    let mut alice = server.connect()?;
    let mut bob = server.connect()?;
    alice.register("secret", "alice")?;
    bob.register("secret", "bob")?;

    alice.send_raw("JOIN #r")?;
    alice.recv_until(|line| line.starts_with("366"))?;
    bob.send_raw("JOIN #r")?;
    bob.recv_until(|line| line.starts_with("366"))?;
    alice.recv()?; // bob's JOIN echo

    bob.send_raw("PART #r")?;
    assert_eq!(alice.recv()?, ":bob!bob@host PART #r");
    assert_eq!(bob.recv()?, ":bob!bob@host PART #r");

    // Bob is gone: messaging the channel he left is now an error for him.
    bob.send_raw("TOPIC #r")?;
    assert_eq!(bob.recv()?, "442 bob #r :You're not on that channel");
    Ok(())
}

#[test]
fn empty_channel_is_recreated_fresh_after_part() -> anyhow::Result<()> {
    let server = TestServer::spawn(16716)?;
    let mut alice = server.connect()?;
    let mut bob = server.connect()?;
    alice.register("secret", "alice")?;
    bob.register("secret", "bob")?;

    alice.send_raw("JOIN #x")?;
    alice.recv_until(|line| line.starts_with("366"))?;
    alice.send_raw("TOPIC #x :remembered?")?;
    alice.recv()?; // topic broadcast
    alice.send_raw("PART #x")?;
    alice.recv()?; // part echo

    // The channel died with its last member; bob recreates it bare and
    // becomes its operator.
    bob.send_raw("JOIN #x")?;
    assert_eq!(bob.recv()?, ":bob!bob@host JOIN #x");
    assert_eq!(bob.recv()?, "331 bob #x :No topic is set");
    assert_eq!(bob.recv()?, "353 bob = #x :@bob ");
    Ok(())
}

#[test]
fn mode_query_and_changes() -> anyhow::Result<()> {
    let server = TestServer::spawn(16717)?;
    let mut alice = server.connect()?;
    alice.register("secret", "alice")?;

    alice.send_raw("JOIN #r")?;
    alice.recv_until(|line| line.starts_with("366"))?;

    alice.send_raw("MODE #r")?;
    assert_eq!(alice.recv()?, "324 alice #r +t");

    alice.send_raw("MODE #r +kl secret 5")?;
    assert_eq!(alice.recv()?, ":alice!alice@host MODE #r +kl secret 5");

    alice.send_raw("MODE #r")?;
    assert_eq!(alice.recv()?, "324 alice #r +tkl secret 5");
    Ok(())
}

#[test]
fn invite_only_channel_admits_invitees() -> anyhow::Result<()> {
    let server = TestServer::spawn(16718)?;
    let mut alice = server.connect()?;
    let mut bob = server.connect()?;
    alice.register("secret", "alice")?;
    bob.register("secret", "bob")?;

    alice.send_raw("JOIN #priv")?;
    alice.recv_until(|line| line.starts_with("366"))?;
    alice.send_raw("MODE #priv +i")?;
    assert_eq!(alice.recv()?, ":alice!alice@host MODE #priv +i");

    bob.send_raw("JOIN #priv")?;
    assert_eq!(bob.recv()?, "473 bob #priv :Cannot join channel (+i)");

    alice.send_raw("INVITE bob #priv")?;
    assert_eq!(alice.recv()?, "341 alice bob #priv");
    assert_eq!(bob.recv()?, ":alice!alice@host INVITE bob :#priv");

    bob.send_raw("JOIN #priv")?;
    assert_eq!(bob.recv()?, ":bob!bob@host JOIN #priv");
    Ok(())
}

#[test]
fn keyed_channel_requires_matching_key() -> anyhow::Result<()> {
    let server = TestServer::spawn(16719)?;
    let mut alice = server.connect()?;
    let mut bob = server.connect()?;
    alice.register("secret", "alice")?;
    bob.register("secret", "bob")?;

    alice.send_raw("JOIN #vault")?;
    alice.recv_until(|line| line.starts_with("366"))?;
    alice.send_raw("MODE #vault +k hunter2")?;
    alice.recv()?;

    bob.send_raw("JOIN #vault")?;
    assert_eq!(bob.recv()?, "475 bob #vault :Cannot join channel (+k)");

    bob.send_raw("JOIN #vault hunter2")?;
    assert_eq!(bob.recv()?, ":bob!bob@host JOIN #vault");
    Ok(())
}
