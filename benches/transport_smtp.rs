use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smtp_xoauth2::{
    transport::smtp::{authentication::Credentials, client::mock::MockStream, SmtpSession},
    Message,
};

const HANDSHAKE: &str = concat!(
    "220 mx.example.org ESMTP ready\r\n",
    "250-mx.example.org\r\n250 STARTTLS\r\n",
    "220 Ready to start TLS\r\n",
    "250-mx.example.org\r\n250 AUTH XOAUTH2\r\n",
    "235 Authentication successful\r\n",
);
const SEND: &str = "250 OK\r\n250 OK\r\n354 Go ahead\r\n250 OK queued\r\n";

fn criterion_benchmark(c: &mut Criterion) {
    let mut email = Message::new();
    email
        .to(vec!["root@example.com".parse().unwrap()])
        .subject("Hello")
        .body("text/plain", "Hello World!");

    c.bench_function("send simple", |b| {
        let mock = MockStream::with_vec(HANDSHAKE.as_bytes().to_vec());
        let mut script = mock.clone();
        let mut recorder = mock.clone();
        let mut session = SmtpSession::builder("mx.example.org")
            .connect_stream(mock, Credentials::new("user@example.com", "token"))
            .unwrap();

        b.iter(|| {
            script.next_vec(SEND.as_bytes());
            let result = session.send(black_box(&email));
            recorder.take_vec();
            assert!(result.is_ok());
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
