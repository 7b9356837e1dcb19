use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use webrouter::request::Request;

fn simple_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /users/42 HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test\r\n\r\n";

    c.bench_function("simple_request_parse", |b| {
        b.iter(|| {
            let _ = Request::try_from(black_box(request.as_slice()), 0).unwrap();
        });
    });
}

fn request_with_body_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_body");

    for size in [0usize, 256, 4096].iter() {
        let mut request = format!(
            "POST /users HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            size
        )
        .into_bytes();
        request.extend(std::iter::repeat(b'x').take(*size));

        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.iter(|| {
                let _ = Request::try_from(black_box(request.as_slice()), 0).unwrap();
            });
        });
    }

    group.finish();
}

fn expected_length_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_expected_length");

    let requests = [
        ("partial_head", b"GET /users/42 HTTP/1.1\r\nHost: local".as_slice()),
        ("no_body", b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n".as_slice()),
        (
            "with_body",
            b"POST /users HTTP/1.1\r\nHost: localhost\r\nContent-Length: 13\r\n\r\n{\"name\":\"a\"}".as_slice(),
        ),
    ];

    for (name, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), request, |b, request| {
            b.iter(|| {
                let _ = Request::expected_length(black_box(request)).unwrap();
            });
        });
    }

    group.finish();
}

fn request_parse_different_path_lengths_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_path_length");

    let paths = [
        ("short", "/"),
        ("medium", "/users/42/posts"),
        ("long", "/very/long/path/to/some/resource/with/many/segments/and/a/query?param1=value1&param2=value2&param3=value3"),
    ];

    for (name, path) in paths.iter() {
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| {
                let _ = Request::try_from(black_box(request.as_bytes()), 0).unwrap();
            });
        });
    }

    group.finish();
}

fn request_case_insensitive_headers_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_header_lookup");

    let requests = [
        ("lowercase", b"GET / HTTP/1.1\r\nhost: localhost\r\nuser-agent: Test\r\naccept-encoding: gzip\r\n\r\n".as_slice()),
        ("uppercase", b"GET / HTTP/1.1\r\nHOST: localhost\r\nUSER-AGENT: Test\r\nACCEPT-ENCODING: gzip\r\n\r\n".as_slice()),
        ("mixed", b"GET / HTTP/1.1\r\nHost: localhost\r\nUser-Agent: Test\r\nAccept-Encoding: gzip\r\n\r\n".as_slice()),
    ];

    for (name, request) in requests.iter() {
        let parsed = Request::try_from(request, 0).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &parsed, |b, parsed| {
            b.iter(|| {
                black_box(parsed.user_agent());
                black_box(parsed.accept_encoding());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    simple_request_parse_benchmark,
    request_with_body_benchmark,
    expected_length_benchmark,
    request_parse_different_path_lengths_benchmark,
    request_case_insensitive_headers_benchmark
);
criterion_main!(benches);
