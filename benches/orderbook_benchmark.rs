//! Benchmarks for order book view operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relayer_orderbook::orderbook::{
    aggregate, annotate, select_price, BookOption, BookView, Depth, OrderBook, OrderBookItem, Side,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn create_book(levels: usize) -> OrderBook {
    let size = Decimal::from_str("1.5").unwrap();

    let buy_orders: Vec<OrderBookItem> = (0..levels)
        .map(|i| OrderBookItem::new(Side::Buy, Decimal::from(50000 - i as i64), size))
        .collect();

    let sell_orders: Vec<OrderBookItem> = (0..levels)
        .map(|i| OrderBookItem::new(Side::Sell, Decimal::from(50001 + i as i64), size))
        .collect();

    let my_size_orders: Vec<OrderBookItem> = buy_orders
        .iter()
        .chain(sell_orders.iter())
        .step_by(7)
        .copied()
        .collect();

    OrderBook {
        buy_orders,
        sell_orders,
        my_size_orders,
    }
}

fn benchmark_aggregate(c: &mut Criterion) {
    let book = create_book(1000);

    c.bench_function("aggregate_sell_1000_levels", |b| {
        b.iter(|| black_box(aggregate(Side::Sell, black_box(&book.sell_orders), Depth::Fifty)))
    });
}

fn benchmark_select_price(c: &mut Criterion) {
    let book = create_book(1000);
    let clicked = book.buy_orders[25];

    c.bench_function("select_price_1000_levels", |b| {
        b.iter(|| black_box(select_price(black_box(&clicked), &book.buy_orders)))
    });
}

fn benchmark_annotate(c: &mut Criterion) {
    let book = create_book(1000);
    let mine = book.my_orders(Side::Buy);

    c.bench_function("annotate_1000_levels", |b| {
        b.iter(|| black_box(annotate(black_box(&book.buy_orders), &mine)))
    });
}

fn benchmark_view(c: &mut Criterion) {
    let book = create_book(1000);

    c.bench_function("build_view", |b| {
        b.iter(|| black_box(BookView::build(black_box(&book), Depth::Twenty, BookOption::Both, true)))
    });
}

criterion_group!(
    benches,
    benchmark_aggregate,
    benchmark_select_price,
    benchmark_annotate,
    benchmark_view
);
criterion_main!(benches);
