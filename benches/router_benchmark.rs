use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use webrouter::{from_fn, handler_fn, Method, Request, Router};

fn build_router(static_routes: usize) -> Router {
    let mut router = Router::new();
    for i in 0..static_routes {
        router
            .route(
                &format!("/static/route{}", i),
                "GET",
                handler_fn(|cx| Box::pin(async move { cx.response.send("ok") })),
            )
            .unwrap();
    }
    router
        .route(
            "/users/:id/posts/:post",
            "GET",
            handler_fn(|cx| Box::pin(async move { cx.response.send("ok") })),
        )
        .unwrap()
        .route(
            "/users/me/settings/:tab",
            "GET",
            handler_fn(|cx| Box::pin(async move { cx.response.send("ok") })),
        )
        .unwrap();
    router
}

fn resolve_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_resolve");
    let router = build_router(100);

    let paths = [
        ("static", "/static/route50"),
        ("params", "/users/7/posts/99"),
        ("static_preferred", "/users/me/settings/privacy"),
        ("miss", "/orders/1/items"),
    ];

    for (name, path) in paths.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), path, |b, path| {
            b.iter(|| router.resolve(black_box(path)));
        });
    }

    group.finish();
}

fn registration_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_register");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| build_router(black_box(size)));
        });
    }

    group.finish();
}

fn dispatch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_dispatch");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    for depth in [0usize, 4, 16].iter() {
        let mut router = build_router(10);
        for _ in 0..*depth {
            router.use_middleware(from_fn(|cx, next| next.run(cx)));
        }
        group.bench_with_input(BenchmarkId::from_parameter(depth), &router, |b, router| {
            b.iter(|| {
                let request = Request::new(Method::Get, "/users/7/posts/99");
                runtime.block_on(router.dispatch(black_box(request)))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, resolve_benchmark, registration_benchmark, dispatch_benchmark);
criterion_main!(benches);
