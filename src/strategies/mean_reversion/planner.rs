use crate::core::types::{Account, Bar, OrderSide, Position};

/// 当前价相对均值的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PriceZone {
    AboveMean,
    BelowMean,
    AtMean,
}

/// 单轮计算得到的价格信号
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PriceSignal {
    pub mean_price: f64,
    pub current_price: f64,
}

impl PriceSignal {
    /// 根据回看窗口计算均价与最新收盘价，K线不足时返回 None
    pub fn from_bars(bars: &[Bar], lookback: usize) -> Option<Self> {
        if lookback == 0 || bars.len() < lookback {
            return None;
        }
        let window = &bars[bars.len() - lookback..];
        let sum: f64 = window.iter().map(|bar| bar.close).sum();
        let current_price = window.last()?.close;
        Some(Self {
            mean_price: sum / lookback as f64,
            current_price,
        })
    }

    pub fn zone(&self) -> PriceZone {
        if self.current_price > self.mean_price {
            PriceZone::AboveMean
        } else if self.current_price < self.mean_price {
            PriceZone::BelowMean
        } else {
            PriceZone::AtMean
        }
    }

    /// 目标仓位占组合价值的比例
    pub fn portfolio_share(&self, gain: f64) -> f64 {
        (self.mean_price - self.current_price) / self.current_price * gain
    }
}

/// 当前持仓的数量与市值，未持仓时均为0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(super) struct Holding {
    pub quantity: i64,
    pub market_value: f64,
}

impl From<&Position> for Holding {
    fn from(position: &Position) -> Self {
        Self {
            quantity: position.quantity,
            market_value: position.market_value,
        }
    }
}

/// 下单计划，数量可能不为正，由下单函数负责过滤
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct OrderPlan {
    pub side: OrderSide,
    pub quantity: i64,
    pub price: f64,
}

/// 价格高于均值：有多头持仓则全部卖出
pub(super) fn plan_exit(signal: &PriceSignal, holding: &Holding) -> Option<OrderPlan> {
    if holding.quantity <= 0 {
        return None;
    }
    Some(OrderPlan {
        side: OrderSide::Sell,
        quantity: holding.quantity,
        price: signal.current_price,
    })
}

/// 需要调整的仓位金额（目标市值 - 当前市值）
pub(super) fn amount_to_add(
    signal: &PriceSignal,
    holding: &Holding,
    account: &Account,
    gain: f64,
) -> f64 {
    let target_value = account.portfolio_value * signal.portfolio_share(gain);
    target_value - holding.market_value
}

/// 价格低于均值：按偏离程度把仓位调向目标市值
pub(super) fn plan_rebalance(
    signal: &PriceSignal,
    holding: &Holding,
    account: &Account,
    gain: f64,
) -> Option<OrderPlan> {
    let price = signal.current_price;
    let amount = amount_to_add(signal, holding, account, gain);

    if amount > 0.0 {
        let amount = amount.min(account.buying_power);
        Some(OrderPlan {
            side: OrderSide::Buy,
            quantity: (amount / price).floor() as i64,
            price,
        })
    } else if amount < 0.0 {
        let shares = (amount.abs() / price).floor() as i64;
        Some(OrderPlan {
            side: OrderSide::Sell,
            quantity: shares.min(holding.quantity),
            price,
        })
    } else {
        None
    }
}
